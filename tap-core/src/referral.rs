use tap_types::UserId;

pub const MINIAPP_BASE: &str = "https://t.me/ribscoin_bot/RIBS?startapp=";

const LEGACY_PREFIX: &str = "ref_";

/// Parse a launch start parameter into a candidate referrer id.
///
/// Accepts the legacy `ref_<id>` form and a bare numeric id. Anything else,
/// including non-positive ids, yields `None`.
pub fn parse_referral_token(token: &str) -> Option<UserId> {
    let token = token.trim();
    let digits = token.strip_prefix(LEGACY_PREFIX).unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<UserId>().ok().filter(|id| *id > 0)
}

/// Referrer to record for `user_id`, if any. Self-referrals are dropped.
pub fn referrer_candidate(user_id: UserId, start_param: Option<&str>) -> Option<UserId> {
    start_param
        .and_then(parse_referral_token)
        .filter(|referrer| *referrer != user_id)
}

pub fn referral_link(user_id: UserId) -> String {
    format!("{}{}", MINIAPP_BASE, user_id)
}
