mod buffering;
mod line_decoder;

pub use buffering::CircularLineBuffer;
pub use line_decoder::{decode_lines, is_done_marker, sse_data, LineDecoder};
