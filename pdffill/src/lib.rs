//! # pdffill: fill a hosted PDF template and save the result
//!
//! `pdffill` sends a template identifier plus a set of field values to a document-generation
//! API (Anvil's PDF fill endpoint), and writes the PDF it gets back to disk.
//!
//! The whole run is one sequence: load configuration, build a client with the API key, make one
//! fill call, write the response body. There is no retry and no caching; running twice makes two
//! calls and overwrites the output twice.
//!
//! ## Write policy
//!
//! By default the output file is only written when the service answers with a success status, so
//! an authentication failure or a rejected payload never leaves a bogus `output.pdf` behind. Set
//! `write_policy: always` to write whatever body came back regardless. Either way, a non-success
//! status makes the run fail.
//!
//! Writes go through a temporary file that is renamed into place, so an interrupted run never
//! leaves a truncated document and a failed run leaves any previous file as it was.
//!
//! ## Example
//!
//! ```no_run
//! use pdffill::{Config, ReqwestFillClient, fill_and_save};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let request = config.fill_request()?;
//!     let client = ReqwestFillClient::new(
//!         config.base_url.clone(),
//!         std::env::var("ANVIL_API_KEY").ok(),
//!         config.request_timeout,
//!     )?;
//!
//!     let outcome = fill_and_save(&client, &request, &config.output, config.write_policy).await?;
//!     println!("{}", outcome.status);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod fill;
pub mod output;
pub mod telemetry;
pub mod types;

pub use client::{FillClient, MockFillClient, ReqwestFillClient};
pub use config::{Args, Config};
pub use error::{FillError, Result};
pub use fill::{FillOutcome, fill_and_report, fill_and_save};
pub use output::WritePolicy;
pub use types::{FillPayload, FillRequest, FillResult, TemplateId};
