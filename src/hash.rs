use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

fn fold(v: u64) -> u32 {
    (v ^ (v >> 32)) as u32
}

/// 32-bit cache key of any hashable value.
pub fn hash32<T: Hash + ?Sized>(value: &T) -> u32 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    fold(hasher.finish())
}

/// Key of a shaped string: the style hash chained with the text bytes.
pub fn text_key(style_hash: u32, text: &str) -> u32 {
    let mut hasher = FxHasher::default();
    hasher.write_u32(style_hash);
    hasher.write(text.as_bytes());
    fold(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_key_depends_on_both_parts() {
        let a = text_key(1, "hello");
        assert_eq!(a, text_key(1, "hello"));
        assert_ne!(a, text_key(2, "hello"));
        assert_ne!(a, text_key(1, "hellp"));
        assert_eq!(hash32("abc"), hash32(&String::from("abc")));
    }
}
