//! CLI command implementations.
//!
//! Each submodule implements one `claimcheck` subcommand. Argument parsing
//! lives in the binary; these types hold the parsed arguments and run them.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `serve` | Run the WebSocket session server |
//! | `verify` | Verify one claim and print the result as JSON |
//! | `extract` | Show the candidate claims found in a transcript |
//!
//! # Example Usage
//!
//! ```bash
//! # Run the session server on a custom address
//! claimcheck serve --bind 0.0.0.0:8080
//!
//! # One-shot verification
//! claimcheck verify "The Eiffel Tower is in Paris"
//!
//! # Inspect extraction
//! claimcheck extract "Paris is the capital of France and I love it there."
//! ```

mod extract;
mod serve;
mod verify;

pub use extract::{ExtractCommand, ExtractedClaim};
pub use serve::ServeCommand;
pub use verify::VerifyCommand;
