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

pub mod health;
pub mod projects;
pub mod prompts;
pub mod scenes;
pub mod shared;

use serde::Deserialize;

/// `page`/`page_size` query parameters shared by every list endpoint
///.
#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageQuery {
    pub fn pagination(&self, max_page_size: u32) -> prompthub_core::model::Pagination {
        let page_size = self.page_size.map(|p| p.min(max_page_size));
        prompthub_core::model::Pagination::new(self.page, page_size)
    }
}
