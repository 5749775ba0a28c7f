/// Check whether an actor appears on an identity allow-list.
///
/// Unlike a channel-level access policy, an empty list admits nobody: a
/// command that names an allow-list grants access only to its entries.
/// Entries match exactly.
pub fn is_listed(actor_id: &str, allowlist: &[String]) -> bool {
    allowlist.iter().any(|id| id == actor_id)
}
