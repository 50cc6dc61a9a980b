pub mod controller;
pub mod model;
pub mod prompt;
pub mod session;
pub mod transcript;

pub use controller::{
    ControllerConfig, ControllerEvent, ControllerState, CycleOutcome, SubmitError, TurnController,
};
pub use model::{ModelCatalog, ModelError, ModelSelector};
pub use prompt::{PromptChain, PromptMessage, SYSTEM_INSTRUCTION, build};
pub use session::ChatSession;
pub use transcript::{GREETING, Role, Transcript, TranscriptError, Turn};
