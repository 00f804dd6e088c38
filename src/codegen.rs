/// Length of generated short codes.
pub const CODE_LENGTH: usize = 7;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a random alphanumeric code of [`CODE_LENGTH`] characters.
///
/// Codes are not checked for uniqueness here; the link store's unique
/// index is the arbiter and callers retry on collision.
pub fn generate_code() -> String {
    (0..CODE_LENGTH)
        .map(|_| {
            let idx = rand::random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}
