//! Command-line grammar: one verb followed by flag/value pairs.
//!
//! Parsing never fails. Unknown verbs become [`Verb::None`], unknown flags
//! are skipped and a flag missing its value is dropped.

use crate::modify::ModifyParam;

/// Values accepted as "true" for boolean flags, compared case-insensitively.
const TRUTHY_WORDS: &[&str] = &["true", "1", "yes", "on", "enable", "en"];

/// Returns true iff `value` is one of the truthy words.
///
/// ```
/// use localacct::args::is_truthy;
///
/// assert!(is_truthy("Yes"));
/// assert!(is_truthy("EN"));
/// assert!(!is_truthy("false"));
/// assert!(!is_truthy("2"));
/// ```
pub fn is_truthy(value: &str) -> bool {
    TRUTHY_WORDS.iter().any(|w| w.eq_ignore_ascii_case(value))
}

/// Sub-command selected by the first word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verb {
    #[default]
    None,
    ListUser,
    ListGroup,
    Get,
    Set,
    Add,
    Remove,
    Rename,
    ChangePassword,
    Join,
    Leave,
    Unlock,
    CheckLogon,
}

impl Verb {
    /// Classifies a verb word. Matching is exact and case-sensitive.
    pub fn from_word(word: &str) -> Self {
        match word {
            "listuser" => Self::ListUser,
            "listgroup" => Self::ListGroup,
            "get" => Self::Get,
            "set" => Self::Set,
            "add" => Self::Add,
            "remove" => Self::Remove,
            "rename" => Self::Rename,
            "changepassword" => Self::ChangePassword,
            "join" => Self::Join,
            "leave" => Self::Leave,
            "unlock" => Self::Unlock,
            "checklogon" => Self::CheckLogon,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Flag {
    User,
    Group,
    NewName,
    Password,
    FullName,
    Description,
    MustChangePassword,
    CannotChangePassword,
    PasswordNeverExpires,
    Disabled,
    ProfilePath,
    LogonScript,
    HomeDirectory,
    HomeDrive,
}

impl Flag {
    fn lookup(token: &str) -> Option<Self> {
        let flag = match token.to_lowercase().as_str() {
            "/u" | "--user" | "--username" => Self::User,
            "/g" | "--group" | "--groupname" => Self::Group,
            "/n" | "--new" | "--newname" => Self::NewName,
            "/p" | "--pwd" | "--password" => Self::Password,
            "/fn" | "--fullname" => Self::FullName,
            "/desc" | "--description" => Self::Description,
            "/must" | "--mustchangepassword" => Self::MustChangePassword,
            "/cant" | "--cantchangepassword" => Self::CannotChangePassword,
            "/never" | "--neverexpirepassword" => Self::PasswordNeverExpires,
            "/disable" | "--disableaccount" => Self::Disabled,
            "/profile" | "--profilepath" => Self::ProfilePath,
            "/script" | "--logonscript" => Self::LogonScript,
            "/hdir" | "--homedirectory" => Self::HomeDirectory,
            "/hdrive" | "--homedrive" => Self::HomeDrive,
            _ => return None,
        };
        Some(flag)
    }
}

/// Parsed command line.
///
/// `modify` stays `None` until a property flag is seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgsParam {
    pub verb: Verb,
    pub user_name: Option<String>,
    pub group_name: Option<String>,
    pub new_name: Option<String>,
    pub password: Option<String>,
    pub modify: Option<ModifyParam>,
}

impl ArgsParam {
    /// Parses the arguments after the program name.
    ///
    /// ```
    /// use localacct::args::{ArgsParam, Verb};
    ///
    /// let args = ArgsParam::parse(["set", "--user", "alice", "/DISABLE", "on"]);
    /// assert_eq!(args.verb, Verb::Set);
    /// assert_eq!(args.user_name.as_deref(), Some("alice"));
    /// assert_eq!(args.modify.unwrap().disabled, Some(true));
    /// ```
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let mut parsed = Self::default();

        let Some((verb, rest)) = args.split_first() else {
            return parsed;
        };
        parsed.verb = Verb::from_word(verb.as_ref());

        let mut tokens = rest.iter().map(|s| AsRef::<str>::as_ref(s));
        while let Some(token) = tokens.next() {
            let Some(flag) = Flag::lookup(token) else {
                continue;
            };
            let Some(value) = tokens.next() else {
                break;
            };
            parsed.apply(flag, value);
        }

        parsed
    }

    fn apply(&mut self, flag: Flag, value: &str) {
        let owned = value.to_string();
        match flag {
            Flag::User => self.user_name = Some(owned),
            Flag::Group => self.group_name = Some(owned),
            Flag::NewName => self.new_name = Some(owned),
            Flag::Password => self.password = Some(owned),
            _ => {
                let modify = self.modify.get_or_insert_with(ModifyParam::new);
                match flag {
                    Flag::FullName => modify.full_name = Some(owned),
                    Flag::Description => modify.description = Some(owned),
                    Flag::MustChangePassword => {
                        modify.must_change_password = Some(is_truthy(value))
                    }
                    Flag::CannotChangePassword => {
                        modify.cannot_change_password = Some(is_truthy(value))
                    }
                    Flag::PasswordNeverExpires => {
                        modify.password_never_expires = Some(is_truthy(value))
                    }
                    Flag::Disabled => modify.disabled = Some(is_truthy(value)),
                    Flag::ProfilePath => modify.profile_path = Some(owned),
                    Flag::LogonScript => modify.logon_script = Some(owned),
                    Flag::HomeDirectory => modify.home_directory = Some(owned),
                    Flag::HomeDrive => modify.home_drive = Some(owned),
                    Flag::User | Flag::Group | Flag::NewName | Flag::Password => {}
                }
            }
        }
    }

    /// True when a group name was given without a user name, which selects
    /// the group form of `get`, `set`, `add`, `remove` and `rename`.
    pub fn targets_group(&self) -> bool {
        self.user_name.is_none() && self.group_name.is_some()
    }
}
