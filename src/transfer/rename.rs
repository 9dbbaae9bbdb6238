use crate::configuration::types::RenamePolicy;

/// Returns the host-side name of `file_name` for the given archival `date`.
///
/// Names whose extension is listed in `policy` get `_Archived_<date>` spliced in before the
/// extension (`report.pdf` -> `report_Archived_2024-01-01.pdf`). The comparison ignores ASCII
/// case and the original spelling of the extension is kept. Everything else, including
/// dot-files and names without an extension, is returned unchanged.
pub fn archived_file_name(file_name: &str, date: &str, policy: &RenamePolicy) -> String {
    let Some(dot) = file_name.rfind('.') else {
        return file_name.to_string();
    };
    if dot == 0 {
        return file_name.to_string();
    }

    let (stem, extension) = file_name.split_at(dot);
    let eligible = policy
        .extensions
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(extension));

    if eligible {
        format!("{}_Archived_{}{}", stem, date, extension)
    } else {
        file_name.to_string()
    }
}
