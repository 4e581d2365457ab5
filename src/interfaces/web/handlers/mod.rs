pub(crate) mod documents;
pub(crate) mod explain;
pub(crate) mod quiz;
pub(crate) mod tokens;
