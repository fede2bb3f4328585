//! Order number derivation.
//!
//! Numbers look like `ABC1234-0006`: a deterministic per-wholesaler
//! prefix (3 alphanumeric initials from the business name + the last 4
//! alphanumeric characters of the wholesaler UUID, all uppercased)
//! followed by the zero-padded sequence.

use common::WholesalerId;

/// Builds the deterministic prefix for a wholesaler.
pub fn prefix(business_name: &str, wholesaler_id: WholesalerId) -> String {
    let mut out = initials(business_name);
    out.push_str(&uuid_tail(wholesaler_id));
    out.to_uppercase()
}

/// Formats a full order number from a prefix and sequence value.
pub fn format_order_number(prefix: &str, sequence: u32) -> String {
    format!("{prefix}-{sequence:04}")
}

fn initials(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if cleaned.is_empty() {
        return "ORG".to_string();
    }
    let mut out: String = cleaned.chars().take(3).collect();
    while out.len() < 3 {
        out.push('X');
    }
    out
}

fn uuid_tail(id: WholesalerId) -> String {
    let cleaned: String = id
        .as_uuid()
        .to_string()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    let tail: String = cleaned
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{tail:0>4}")
}
