/// Assistant response formatting - Gateway

mod html;
mod normalize;

pub use html::to_html;
pub use normalize::normalize;
