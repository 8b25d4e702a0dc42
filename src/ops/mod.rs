pub mod entity_ops;
pub mod locate;
pub mod normalize;
pub mod projection;
