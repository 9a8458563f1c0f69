// Copyright 2026 PromptHub Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! The `none` engine: content passes through verbatim, no
//! variable substitution at all. Used for prompts that are already final
//! text (e.g. system prompts with no parameters).

use prompthub_core::Result;
use serde_json::Value;
use std::collections::HashMap;

pub fn render(content: &str, _variables: &HashMap<String, Value>) -> Result<String> {
    Ok(content.to_string())
}
