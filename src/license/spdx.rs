use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::LicenseFamily;

/// SPDX placeholder for "no license claim was made or detected".
pub const NOASSERTION: &str = "NOASSERTION";

/// Values some sources emit instead of a license; never a real candidate.
const PLACEHOLDERS: &[&str] = &[NOASSERTION, "NONE", "UNKNOWN", "NOT FOUND", ""];

/// Shape of a single SPDX identifier or `LicenseRef-*` (no spaces).
static SPDX_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.+\-]*$").expect("static regex"));

/// Whether `raw` is one of the placeholder values (case-insensitive).
pub fn is_placeholder(raw: &str) -> bool {
    let upper = raw.trim().to_ascii_uppercase();
    PLACEHOLDERS.contains(&upper.as_str())
}

/// Whether `id` has the syntax of an SPDX identifier, optionally followed by
/// a `WITH <exception>` clause.
pub fn looks_like_spdx_id(id: &str) -> bool {
    let mut parts = id.split(" WITH ");
    let base_ok = parts.next().map(|b| SPDX_ID.is_match(b.trim())).unwrap_or(false);
    base_ok && parts.all(|p| SPDX_ID.is_match(p.trim()))
}

/// Map common non-SPDX spellings and deprecated ids to canonical SPDX ids.
///
/// Anything not in the table is returned trimmed but otherwise unchanged, so
/// unmapped values stay visible downstream.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if is_placeholder(trimmed) {
        return NOASSERTION.to_string();
    }
    match trimmed {
        "Apache 2.0" | "Apache-2" | "Apache License 2.0" | "Apache License, Version 2.0"
        | "Apache Software License" => "Apache-2.0".to_string(),
        "MIT License" | "The MIT License" | "MIT license" => "MIT".to_string(),
        "BSD" | "BSD License" => "BSD-3-Clause".to_string(),
        "BSD 2-Clause" | "Simplified BSD" => "BSD-2-Clause".to_string(),
        "BSD 3-Clause" | "New BSD" | "Modified BSD" => "BSD-3-Clause".to_string(),
        "GPL-2.0" | "GNU GPL v2" | "GNU General Public License v2" | "GPL v2" | "GPLv2" => {
            "GPL-2.0-only".to_string()
        }
        "GPL-2.0+" | "GPLv2+" => "GPL-2.0-or-later".to_string(),
        "GPL-3.0" | "GNU GPL v3" | "GNU General Public License v3" | "GPL v3" | "GPLv3"
        | "GNU General Public License v3.0" => "GPL-3.0-only".to_string(),
        "GPL-3.0+" | "GPLv3+" | "GNU GPL" | "GNU General Public License v3 or later (GPLv3+)" => {
            "GPL-3.0-or-later".to_string()
        }
        "LGPL-2.1" | "GNU LGPL v2.1" | "LGPL v2.1" | "LGPLv2.1" => "LGPL-2.1-only".to_string(),
        "LGPL-2.1+" => "LGPL-2.1-or-later".to_string(),
        "LGPL-3.0" | "GNU LGPL v3" | "LGPL v3" | "LGPLv3" => "LGPL-3.0-only".to_string(),
        "LGPL-3.0+" => "LGPL-3.0-or-later".to_string(),
        "AGPL-3.0" | "AGPL v3" | "AGPLv3" | "GNU AGPL v3" => "AGPL-3.0-only".to_string(),
        "Mozilla Public License 2.0" | "MPL 2.0" | "MPLv2" => "MPL-2.0".to_string(),
        "ISC License" => "ISC".to_string(),
        "CC0" | "Public Domain" => "CC0-1.0".to_string(),
        other => other.to_string(),
    }
}

/// License id with any `WITH <exception>` clause removed.
pub fn base_id(id: &str) -> &str {
    id.split_once(" WITH ").map_or(id, |(base, _)| base).trim()
}

/// Coarse family of a single canonical SPDX identifier.
pub fn family_of(id: &str) -> LicenseFamily {
    // WITH exceptions only relax obligations; the base id decides the family.
    match base_id(id) {
        "MIT"
        | "MIT-0"
        | "Apache-2.0"
        | "BSD-2-Clause"
        | "BSD-3-Clause"
        | "BSD-4-Clause"
        | "ISC"
        | "0BSD"
        | "Unlicense"
        | "Zlib"
        | "CC0-1.0"
        | "WTFPL"
        | "CC-BY-4.0"
        | "CC-BY-3.0"
        | "PSF-2.0"
        | "Python-2.0"
        | "BlueOak-1.0.0"
        | "Artistic-2.0" => LicenseFamily::Permissive,

        "LGPL-2.0-only"
        | "LGPL-2.0-or-later"
        | "LGPL-2.1-only"
        | "LGPL-2.1-or-later"
        | "LGPL-3.0-only"
        | "LGPL-3.0-or-later"
        | "MPL-2.0"
        | "EUPL-1.2"
        | "CDDL-1.0"
        | "EPL-1.0"
        | "EPL-2.0"
        | "OSL-3.0" => LicenseFamily::WeakCopyleft,

        "GPL-2.0-only"
        | "GPL-2.0-or-later"
        | "GPL-3.0-only"
        | "GPL-3.0-or-later"
        | "AGPL-3.0-only"
        | "AGPL-3.0-or-later"
        | "SSPL-1.0" => LicenseFamily::StrongCopyleft,

        "BUSL-1.1" | "Elastic-2.0" | "LicenseRef-Proprietary" | "LicenseRef-Commercial" => {
            LicenseFamily::Proprietary
        }

        _ => LicenseFamily::Unknown,
    }
}
