//! Visitor classification: who is calling, from where, on what device.

pub mod agent;
pub mod geo;
pub mod ip;

pub use agent::{browser_label, classify_device};
pub use geo::{GeoClient, GeoInfo};
pub use ip::resolve_client_ip;

use crate::clock::{Clock, LocalStamp};
use crate::store::records::VisitRecord;
use chrono::FixedOffset;

/// Build the visit log entry for a request.
///
/// `user_agent` is the raw header value; callers pass `Unknown` when the
/// header is absent. The geolocation lookup never fails this call.
pub async fn describe_visit(
    geo: &GeoClient,
    clock: &dyn Clock,
    offset: FixedOffset,
    ip: &str,
    user_agent: &str,
) -> VisitRecord {
    let location = geo.lookup_or_unknown(ip).await;
    let stamp = LocalStamp::now(clock, offset);

    VisitRecord {
        ip: ip.to_string(),
        country: location.country,
        vpn: location.vpn,
        isp: location.isp,
        device: classify_device(user_agent),
        browser: browser_label(user_agent),
        time: stamp.time,
        date: stamp.date,
    }
}
