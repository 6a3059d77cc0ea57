/// Mask a secret value for logging: keep two characters at each end of longer values
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }

    let mut masked = String::with_capacity(value.len());
    masked.extend(&chars[..2]);
    masked.push_str(&"*".repeat(chars.len() - 4));
    masked.extend(&chars[chars.len() - 2..]);
    masked
}
