//! User-Agent admission policy.
//!
//! Only a denylist hit is fatal (and permanently bans the IP). Empty and
//! unrecognized agents are reported but still admitted.

/// Automation and attack-tool signatures. A match bans the client IP.
pub const DENIED_TOOLS: &[&str] = &[
    "curl", "wget", "httpie", "powershell", "postman", "insomnia",
    "fiddler", "burpsuite", "nmap", "nikto", "acunetix", "sqlmap",
    "arachni", "wapiti", "metasploit", "zaproxy", "hydra", "medusa",
    "aircrack", "ettercap", "bettercap", "sslscan", "masscan",
    "node-fetch", "got", "dart-http", "libcurl", "nc", "netcat",
    "python-urllib", "okhttp", "java-http-client", "ruby-net-http",
    "perl-lwp", "go-http-client", "rust-reqwest", "php-curl",
    "php-http", "scrapy", "selenium",
];

/// Substrings of agents considered familiar: browsers, mobile platforms,
/// chat/social apps, bot frameworks and common client libraries.
pub const KNOWN_AGENTS: &[&str] = &[
    // browsers
    "chrome", "chromium", "firefox", "safari", "edge", "edg", "opera",
    "opera gx", "brave", "vivaldi", "yandex", "ucbrowser",
    // mobile
    "android", "iphone", "ipad", "ipod", "mobile", "samsungbrowser",
    "miuibrowser", "huawei", "honorbrowser", "realme", "oppo",
    "puffin", "duckduckgo", "kiwi", "phoenix", "xbrowser",
    // platform tokens
    "wv", "version", "linux", "windows nt", "macintosh", "mac os",
    "gecko", "applewebkit",
    // apps
    "discord", "discordbot", "telegram", "whatsapp", "facebook",
    "instagram", "messenger", "tiktok", "snapchat",
    // client libraries
    "python-requests", "okhttp", "axios", "fetch", "postman-runtime",
    // discord bots
    "discord.py", "discord.js", "hikari", "nextcord", "py-cord",
    "discordgo", "discordrb",
    // telegram bots
    "python-telegram-bot", "telethon", "pyrogram", "aiogram", "grammy",
    // python web stacks
    "flask", "fastapi", "uvicorn", "werkzeug",
];

/// Outcome of inspecting a User-Agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentVerdict {
    /// Header missing or blank. Admitted with a warning.
    Empty,
    /// Matched a denylisted tool. Refused and the IP is banned.
    Denied(&'static str),
    /// Matched neither list. Admitted with a warning.
    Unrecognized,
    /// Matched the allow-list.
    Recognized,
}

impl AgentVerdict {
    /// Whether the request may proceed.
    #[cfg(test)]
    pub fn admits(&self) -> bool {
        !matches!(self, AgentVerdict::Denied(_))
    }
}

/// Inspect a User-Agent against the denylist and allow-list.
///
/// Matching is case-insensitive substring search. The denylist is checked
/// first, so an agent on both lists is denied.
pub fn inspect_agent(user_agent: &str) -> AgentVerdict {
    let ua = user_agent.to_lowercase();
    if ua.trim().is_empty() {
        return AgentVerdict::Empty;
    }

    if let Some(tool) = DENIED_TOOLS.iter().find(|tool| ua.contains(*tool)) {
        return AgentVerdict::Denied(*tool);
    }

    if KNOWN_AGENTS.iter().any(|agent| ua.contains(agent)) {
        AgentVerdict::Recognized
    } else {
        AgentVerdict::Unrecognized
    }
}
