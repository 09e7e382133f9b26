mod lines;
mod message;
mod stream;
mod tool;
mod traits;

pub use message::{ChatMessage, ChatMessageBuilder, ChatRole, MessageType};
pub use stream::StreamDelta;
pub use tool::{FunctionTool, ParameterProperty, ParametersSchema, Tool};
pub use traits::{ChatProvider, ChatResponse};

pub(crate) use lines::create_line_stream;
