use super::CliError;

/// Tokenised command arguments: `--flag value` pairs, bare `--switch`es and
/// positionals, in the order given. Flags may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgList {
    flags: Vec<(String, Option<String>)>,
    positionals: Vec<String>,
}

impl ArgList {
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Self {
        let mut list = ArgList::default();
        let mut iter = tokens.iter().map(AsRef::as_ref).peekable();
        while let Some(token) = iter.next() {
            if let Some(name) = token.strip_prefix("--") {
                if let Some((name, value)) = name.split_once('=') {
                    list.flags.push((name.to_string(), Some(value.to_string())));
                    continue;
                }
                let value = match iter.peek() {
                    Some(next) if !next.starts_with("--") => iter.next().map(str::to_string),
                    _ => None,
                };
                list.flags.push((name.to_string(), value));
            } else {
                list.positionals.push(token.to_string());
            }
        }
        list
    }

    pub fn has(&self, name: &str) -> bool {
        self.flags.iter().any(|(flag, _)| flag == name)
    }

    /// Last value given for `name`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.flags
            .iter()
            .rev()
            .find(|(flag, _)| flag == name)
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn values(&self, name: &str) -> Vec<&str> {
        self.flags
            .iter()
            .filter(|(flag, _)| flag == name)
            .filter_map(|(_, value)| value.as_deref())
            .collect()
    }

    pub fn required(&self, name: &str) -> Result<&str, CliError> {
        self.value(name)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| CliError::Input(format!("missing required option `--{name}`")))
    }

    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positionals.get(index).map(String::as_str)
    }

    /// Rejects flags the command does not understand.
    pub fn ensure_known(&self, known: &[&str]) -> Result<(), CliError> {
        match self.flags.iter().find(|(flag, _)| !known.contains(&flag.as_str())) {
            Some((flag, _)) => Err(CliError::Input(format!("unknown option `--{flag}`"))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_switches_and_positionals() {
        let args = ArgList::parse(&["restore", "--brand", "Acme", "--dry", "--qty=3", "--rate", "-2"]);
        assert_eq!(args.positional(0), Some("restore"));
        assert_eq!(args.value("brand"), Some("Acme"));
        assert!(args.has("dry"));
        assert_eq!(args.value("dry"), None);
        assert_eq!(args.value("qty"), Some("3"));
        assert_eq!(args.value("rate"), Some("-2"));
    }

    #[test]
    fn repeated_flags_collect_in_order() {
        let args = ArgList::parse(&["--item", "a", "--item", "b"]);
        assert_eq!(args.values("item"), vec!["a", "b"]);
        assert_eq!(args.value("item"), Some("b"));
    }

    #[test]
    fn unknown_and_missing_flags_are_errors() {
        let args = ArgList::parse(&["--nmae", "Bulb"]);
        assert!(args.ensure_known(&["name"]).is_err());
        assert!(args.required("name").is_err());
    }
}
