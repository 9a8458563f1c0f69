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

pub mod call_log_store;
pub mod project_store;
pub mod prompt_store;
pub mod reference_index;
pub mod scene_store;

pub use call_log_store::{CallLogStore, InMemoryCallLogStore};
pub use project_store::{InMemoryProjectStore, ProjectStore};
pub use prompt_store::{
    InMemoryPromptStore, ListFilters, NewPrompt, PromptStore, PromptUpdate, SortKey, SortOrder,
};
pub use reference_index::{InMemoryReferenceIndex, ReferenceIndex};
pub use scene_store::{InMemorySceneStore, NewScene, SceneStore, SceneUpdate};
