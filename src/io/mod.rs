// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! File stuff: finding level 0.8 files, reading them and writing level 0.9
//! files.

pub mod fits;
mod glob;

pub use self::glob::{discover_inputs, scan_number, GlobError, InputFile};
