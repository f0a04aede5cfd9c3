//! List command.
//!
//! ## Output Format
//!
//! ```text
//! NAME           REPOSITORY                 BINARY
//! bat            sharkdp/bat                bat
//! ripgrep        BurntSushi/ripgrep         rg
//! ```

use crate::catalog;

/// Prints every supported tool.
pub fn execute() {
    println!("{:<14} {:<26} BINARY", "NAME", "REPOSITORY");
    for app in catalog::APPS {
        println!("{:<14} {:<26} {}", app.name, app.repository(), app.binary);
    }
}
