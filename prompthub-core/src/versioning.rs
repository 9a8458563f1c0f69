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

//! Semantic version bumping, per "given current_version =
//! MAJOR.MINOR.PATCH and bump, the new version increments the corresponding
//! field and zeros lower fields."

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bump {
    Patch,
    Minor,
    Major,
}

pub fn bump_version(current: &semver::Version, bump: Bump) -> semver::Version {
    let mut next = current.clone();
    next.pre = semver::Prerelease::EMPTY;
    next.build = semver::BuildMetadata::EMPTY;
    match bump {
        Bump::Major => {
            next.major += 1;
            next.minor = 0;
            next.patch = 0;
        }
        Bump::Minor => {
            next.minor += 1;
            next.patch = 0;
        }
        Bump::Patch => {
            next.patch += 1;
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> semver::Version {
        semver::Version::parse(s).unwrap()
    }

    #[test]
    fn minor_bump_zeros_patch() {
        assert_eq!(bump_version(&v("1.2.3"), Bump::Minor), v("1.3.0"));
    }

    #[test]
    fn major_bump_zeros_minor_and_patch() {
        assert_eq!(bump_version(&v("1.2.3"), Bump::Major), v("2.0.0"));
    }

    #[test]
    fn patch_bump_only_increments_patch() {
        assert_eq!(bump_version(&v("1.2.3"), Bump::Patch), v("1.2.4"));
    }

    #[test]
    fn bump_strips_prerelease_and_build_metadata() {
        assert_eq!(bump_version(&v("1.2.3-rc.1+build.5"), Bump::Patch), v("1.2.4"));
    }

    #[test]
    fn published_versions_strictly_increase() {
        let mut current = v("0.1.0");
        let mut history = vec![current.clone()];
        for bump in [Bump::Minor, Bump::Patch, Bump::Major, Bump::Patch] {
            current = bump_version(&current, bump);
            history.push(current.clone());
        }
        for pair in history.windows(2) {
            assert!(pair[0] < pair[1], "{} should be < {}", pair[0], pair[1]);
        }
    }
}
