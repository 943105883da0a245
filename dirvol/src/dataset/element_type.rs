use derive_more::Display;

/// The declared element type of a dataset.
///
/// The element type is recorded once when a dataset is created and never changes.
/// Element values are always transferred as [`i32`], whatever the declared type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum ElementType {
    /// A 32-bit signed integer.
    #[display("int32")]
    Int32,
    /// A 32-bit floating point number.
    #[display("float32")]
    Float32,
}

impl ElementType {
    /// The tag recorded in the datatype artifact.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Int32 => "TUTORIAL_DATA_TYPE_INT",
            Self::Float32 => "TUTORIAL_DATA_TYPE_FLOAT",
        }
    }

    /// Return the element type with a given datatype artifact `tag`, or [`None`] if it is not recognised.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        [Self::Int32, Self::Float32]
            .into_iter()
            .find(|element_type| element_type.tag() == tag)
    }
}
