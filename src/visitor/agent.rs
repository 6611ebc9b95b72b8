//! User-Agent derived labels.

use crate::store::records::DeviceClass;

/// Number of characters kept when a User-Agent has no product token.
const RAW_LABEL_CHARS: usize = 20;

/// Classify the device behind a User-Agent.
///
/// Phone markers win over tablet markers, so an Android tablet UA that
/// carries both resolves to [`DeviceClass::Phone`].
pub fn classify_device(user_agent: &str) -> DeviceClass {
    let ua = user_agent.to_lowercase();
    if ["mobile", "android", "iphone"].iter().any(|m| ua.contains(m)) {
        return DeviceClass::Phone;
    }
    if ["tablet", "ipad"].iter().any(|m| ua.contains(m)) {
        return DeviceClass::Tap;
    }
    DeviceClass::Pc
}

/// Short browser label for the visit log.
///
/// `Mozilla/5.0 (...)` becomes `Mozilla`; agents without a `/` are kept
/// verbatim up to 20 characters.
pub fn browser_label(user_agent: &str) -> String {
    match user_agent.split_once('/') {
        Some((product, _)) => title_case(product),
        None => user_agent.chars().take(RAW_LABEL_CHARS).collect(),
    }
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_markers() {
        assert_eq!(
            classify_device("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)"),
            DeviceClass::Phone
        );
        assert_eq!(classify_device("Dalvik/2.1.0 (Linux; U; Android 13)"), DeviceClass::Phone);
        assert_eq!(classify_device("SomeApp Mobile"), DeviceClass::Phone);
    }

    #[test]
    fn test_phone_wins_over_tablet() {
        assert_eq!(
            classify_device("Mozilla/5.0 (Linux; Android 12; SM-T970 Tablet)"),
            DeviceClass::Phone
        );
    }

    #[test]
    fn test_tablet_markers() {
        assert_eq!(
            classify_device("Mozilla/5.0 (iPad; CPU OS 16_0 like Mac OS X)"),
            DeviceClass::Tap
        );
        assert_eq!(classify_device("Generic TABLET browser"), DeviceClass::Tap);
    }

    #[test]
    fn test_everything_else_is_pc() {
        assert_eq!(
            classify_device("Mozilla/5.0 (Windows NT 10.0; Win64; x64)"),
            DeviceClass::Pc
        );
        assert_eq!(classify_device(""), DeviceClass::Pc);
    }

    #[test]
    fn test_browser_label_product_token() {
        assert_eq!(browser_label("Mozilla/5.0 (X11; Linux x86_64)"), "Mozilla");
        assert_eq!(browser_label("python-requests/2.31.0"), "Python-Requests");
        assert_eq!(browser_label("OKHTTP/4.9"), "Okhttp");
    }

    #[test]
    fn test_browser_label_without_slash() {
        assert_eq!(browser_label("Unknown"), "Unknown");
        assert_eq!(
            browser_label("a very long agent string without product"),
            "a very long agent st"
        );
    }

    #[test]
    fn test_title_case_digits_break_words() {
        assert_eq!(title_case("abc1def"), "Abc1Def");
        assert_eq!(title_case("discord.py"), "Discord.Py");
    }
}
