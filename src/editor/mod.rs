//! Editing core
//!
//! This module contains the host-facing side of the editor: the attributed
//! text storage, the editable surface with its undo stack, the input
//! processors for list completion, LaTeX preview requests, and the session
//! controller that wires them to the highlighter.

pub mod input;
pub mod latex;
pub mod session;
pub mod storage;
pub mod surface;

pub use input::{InputPipeline, InputProcessor, ProcessorOutcome, ProposedEdit};
pub use latex::{LatexPreviews, LatexRenderer, RenderCallback, RenderedPreview, RequestId};
pub use session::{EditSession, Popover, SessionState};
pub use storage::{AttributedBuffer, ChangeNotification, TextStorage};
pub use surface::{map_offset, EditSurface, MemorySurface};
