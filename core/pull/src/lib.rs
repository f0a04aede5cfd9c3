#![warn(clippy::pedantic)]
//! Installing and updating prebuilt command line tools from release pages.
//!
//! Each tool is described by a constant [`AppSpec`]: where it is published,
//! which release assets to download, which files to take out of them, how to
//! read the installed version and which commands generate extra files.
//! The [`Installer`] turns a descriptor into files under a prefix such as
//! `/usr/local`.
//!
//! ## Overview
//!
//! ```text
//! version probe ─> latest release ─> download ─> extract ─> post-process ─> write
//!                      │                │
//!                      └── ReleaseCache ┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use usr_local_pull::{Installer, ReleaseCache, ReleaseClient, Settings, AppSpec};
//!
//! async fn update(spec: &AppSpec) -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env();
//!     let client = ReleaseClient::from_settings(&settings)?;
//!     let mut cache = ReleaseCache::new(&settings.cache_dir);
//!     let installer = Installer::new(&settings.prefix, &client);
//!     let outcome = installer.install(spec, &mut cache).await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`archive`] | Format detection, member listing and extraction |
//! | [`release`] | Validated release metadata |
//! | [`cache`] | Two-tier release and payload cache |
//! | [`client`] | Release API access through the cache |
//! | [`version`] | Installed version probing and comparison |
//! | [`spec`] | Tool descriptors |
//! | [`artifact`] | Files to write and where |
//! | [`postprocess`] | Commands run on the downloaded binary |
//! | [`engine`] | The install state machine |
//! | [`config`] | Environment-derived settings |

pub mod archive;
pub mod artifact;
pub mod cache;
pub mod client;
pub mod config;
pub mod engine;
pub mod errors;
pub mod postprocess;
pub mod release;
pub mod spec;
pub mod version;

pub use archive::{ArchiveFormat, ArchiveHandle};
pub use artifact::{InstallArtifact, InstallationTarget};
pub use cache::{Clock, FixedClock, ReleaseCache, SystemClock};
pub use client::ReleaseClient;
pub use config::Settings;
pub use engine::{InstallOutcome, InstallState, Installer, VersionCheck};
pub use errors::{InstallError, PullError, Result};
pub use release::{Asset, Release};
pub use spec::{AppSpec, AssetRule, AssetSelector, Install, MemberRule, PostStep};
pub use version::{SplitRule, VersionProbe};
