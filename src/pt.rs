use std::fmt;
use std::hash::{Hash, Hasher};

/// Font size or outline thickness in pixels, usable as part of a font key.
///
/// Two sizes are the same key only when their `f32` bits match, so `16`,
/// `16.0f32` and `16.0f64` open one font while `0.0` and `-0.0` stay apart.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pt(pub(crate) f32);

impl Pt {
    pub fn as_f32(self) -> f32 {
        self.0
    }
}

impl fmt::Display for Pt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for Pt {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Pt {}

impl Hash for Pt {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state)
    }
}

impl From<f32> for Pt {
    fn from(v: f32) -> Self {
        Pt(v)
    }
}

// Style literals like `16.0` default to f64.
impl From<f64> for Pt {
    fn from(v: f64) -> Self {
        Pt(v as f32)
    }
}

impl From<i32> for Pt {
    fn from(v: i32) -> Self {
        Pt(v as f32)
    }
}
