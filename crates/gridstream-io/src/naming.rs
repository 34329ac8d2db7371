//! Sheet naming under Excel rules: at most 31 characters, none of
//! `* : ? / \ [ ]`, not blank.

use gridstream_core::id::SheetIndex;
use gridstream_core::limits::{SHEET_NAME_ILLEGAL, SHEET_NAME_MAX_LEN};

pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut name = name.to_string();
    for illegal in SHEET_NAME_ILLEGAL {
        name = name.replace(illegal, replace_to);
    }
    let name = name.trim();
    if name.is_empty() {
        return "Sheet".to_string();
    }
    name.chars().take(SHEET_NAME_MAX_LEN).collect()
}

/// `base` for the first sheet, `base_<n>` afterwards, always within the
/// length limit.
pub fn sheet_name_for(base: &str, sheet: SheetIndex) -> String {
    let base = sanitize_sheet_name(base, "_");
    if sheet.get() <= 1 {
        return base;
    }
    let suffix = format!("_{}", sheet.get());
    let keep = SHEET_NAME_MAX_LEN.saturating_sub(suffix.len()).max(1);
    let head: String = base.chars().take(keep).collect();
    format!("{head}{suffix}")
}
