#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ShapeError {
    #[error("{entity} payload is not a JSON object.")]
    NotAnObject { entity: &'static str },

    #[error("{entity} payload has no usable `{field}` field.")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },
}
