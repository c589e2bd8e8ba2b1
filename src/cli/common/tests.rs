// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::str::FromStr;

use super::*;

#[test]
fn arg_file_types() {
    assert!(matches!(ArgFileTypes::from_str("toml"), Ok(ArgFileTypes::Toml)));
    assert!(matches!(ArgFileTypes::from_str("json"), Ok(ArgFileTypes::Json)));
    assert!(ArgFileTypes::from_str("yaml").is_err());
    assert_eq!(ARG_FILE_TYPES_COMMA_SEPARATED.as_str(), "toml, json");
    assert!(ARG_FILE_HELP.ends_with("toml, json"));
}
