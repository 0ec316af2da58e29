//! Pipeline stages around a merge: loading inputs and writing the output.

mod load;
mod output;

pub use load::{ensure_distinct, load_input, load_inputs, LoadedInput};
pub use output::{write_document, write_output, OutputTarget};

