use rand::Rng;

/// Total identifier length, prefix included. Comfortably inside the
/// provider's 6..=30 limit for project and account ids.
pub const ID_LENGTH: usize = 27;

const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz1234567890-";
// No hyphen directly after the prefix or at the end.
const EDGE_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz1234567890";

/// Produces `prefix` followed by random fill up to [`ID_LENGTH`] chars.
///
/// Uniqueness is not guaranteed locally; a collision surfaces as a failed
/// creation item inside the batch and is simply dropped there.
pub fn generate_id(prefix: &str) -> String {
    debug_assert!(prefix.len() < ID_LENGTH);
    let fill = ID_LENGTH.saturating_sub(prefix.len());
    let mut rng = rand::thread_rng();
    let mut id = String::with_capacity(ID_LENGTH);
    id.push_str(prefix);
    for position in 0..fill {
        let set = if position == 0 || position + 1 == fill {
            EDGE_CHARS
        } else {
            CHARS
        };
        id.push(set[rng.gen_range(0..set.len())] as char);
    }
    id
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_length_and_prefix() {
        let id = generate_id("saf-");
        assert_eq!(ID_LENGTH, id.len());
        assert!(id.starts_with("saf-"));
    }

    #[test]
    fn test_charset_and_edge_constraints() {
        for _ in 0..500 {
            let id = generate_id("saf-");
            let fill = &id["saf-".len()..];
            assert!(fill
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-'));
            assert_ne!(Some('-'), fill.chars().next());
            assert_ne!(Some('-'), fill.chars().last());
        }
    }

    #[test]
    fn test_ids_are_distinct() {
        let ids: HashSet<String> = (0..100).map(|_| generate_id("saf-")).collect();
        assert_eq!(100, ids.len());
    }
}
