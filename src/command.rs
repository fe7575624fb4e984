//! Command construction for the two pipeline stages.
//!
//! Pattern and path values are inserted verbatim — no shell escaping is
//! performed. The search stage runs through a shell, so this is a documented
//! injection surface carried over from the tool's command syntax; the index
//! stage is spawned with an argument vector and never touches a shell
//! locally.

/// Parent directory of the database path, trailing slash kept.
pub fn database_dir(database_path: &str) -> String {
    match database_path.rfind('/') {
        Some(idx) => database_path[..idx + 1].to_string(),
        None => String::new(),
    }
}

/// Three-stage shell pipeline for the search: locate the matches, run them
/// through `ls`, then strip the database's directory prefix from each result
/// line and indent two spaces. The last stage is purely cosmetic.
pub fn search_pipeline(
    locate_exe: &str,
    database_path: &str,
    pattern: &str,
    switches: &str,
) -> String {
    let dir = database_dir(database_path);
    format!(
        "{locate} --basename --database={db} {pattern} | xargs -r ls {switches} | sed -e 's|^{dir}|  |'",
        locate = locate_exe,
        db = database_path,
        pattern = pattern,
        switches = switches,
        dir = dir,
    )
}

/// Argument vector for the index builder: `--localpaths=<dir>`, the optional
/// quoted prune list, `--output=<database>`, in that order. An empty prune
/// list omits the `--prunepaths` argument entirely.
pub fn index_args(database_path: &str, prunepaths: &[String]) -> Vec<String> {
    let dir = database_dir(database_path);
    let mut args = vec![format!("--localpaths={}", dir)];
    if !prunepaths.is_empty() {
        let joined = prunepaths
            .iter()
            .map(|prune| format!("{}{}", dir, prune))
            .collect::<Vec<_>>()
            .join(" ");
        args.push(format!("--prunepaths=\"{}\"", joined));
    }
    args.push(format!("--output={}", database_path));
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_args_with_prune_list() {
        let args = index_args("/data/locate.db", &[".git".to_string()]);
        assert_eq!(
            args,
            vec![
                "--localpaths=/data/",
                "--prunepaths=\"/data/.git\"",
                "--output=/data/locate.db",
            ]
        );
    }

    #[test]
    fn index_args_join_multiple_prunes_with_spaces() {
        let args = index_args(
            "/srv/tree/locate.db",
            &[".git".to_string(), "CVS".to_string()],
        );
        assert_eq!(args[1], "--prunepaths=\"/srv/tree/.git /srv/tree/CVS\"");
    }

    #[test]
    fn empty_prune_list_omits_the_argument() {
        let args = index_args("/data/locate.db", &[]);
        assert_eq!(
            args,
            vec!["--localpaths=/data/", "--output=/data/locate.db"]
        );
        assert!(!args.iter().any(|arg| arg.contains("prunepaths")));
    }

    #[test]
    fn search_pipeline_has_three_stages() {
        let command = search_pipeline("/usr/bin/locate", "/data/locate.db", "*.rs", "-dilsb");
        assert_eq!(
            command,
            "/usr/bin/locate --basename --database=/data/locate.db *.rs \
             | xargs -r ls -dilsb | sed -e 's|^/data/|  |'"
        );
    }

    #[test]
    fn pattern_is_inserted_verbatim() {
        let command = search_pipeline("locate", "/d/locate.db", "a b", "-l");
        assert!(command.contains("--database=/d/locate.db a b |"));
    }

    #[test]
    fn database_dir_keeps_trailing_slash() {
        assert_eq!(database_dir("/data/locate.db"), "/data/");
        assert_eq!(database_dir("locate.db"), "");
    }
}
