//! PowerShell scripts run by the Windows provider.
//!
//! Scripts never embed account data. Each one reads a single JSON object
//! from stdin (`$in`), so names, passwords and change sets need no quoting.
//! Exit code 3 means the requested account does not exist.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Exit code a script uses for "account not found".
pub const EXIT_NOT_FOUND: i32 = 3;

const PRELUDE: &str = r#"
$ErrorActionPreference = 'Stop'
$ProgressPreference = 'SilentlyContinue'
[Console]::InputEncoding = [System.Text.Encoding]::UTF8
[Console]::OutputEncoding = [System.Text.Encoding]::UTF8
Add-Type -AssemblyName System.DirectoryServices
Add-Type -AssemblyName System.DirectoryServices.AccountManagement
$in = [Console]::In.ReadToEnd() | ConvertFrom-Json
$machine = if ($in.Machine) { $in.Machine } else { $env:COMPUTERNAME }

function Open-Entry([string]$name, [string]$class) {
    $root = New-Object System.DirectoryServices.DirectoryEntry("WinNT://$machine,computer")
    try {
        try { return $root.Children.Find($name, $class) } catch { return $null }
    } finally {
        $root.Dispose()
    }
}

function Get-Prop($entry, [string]$prop) {
    if ($entry.Properties.Contains($prop)) { [string]$entry.Properties[$prop].Value } else { '' }
}

function New-Context {
    New-Object System.DirectoryServices.AccountManagement.PrincipalContext(
        [System.DirectoryServices.AccountManagement.ContextType]::Machine, $machine)
}

function Find-User($ctx, [string]$name) {
    [System.DirectoryServices.AccountManagement.UserPrincipal]::FindByIdentity(
        $ctx, [System.DirectoryServices.AccountManagement.IdentityType]::SamAccountName, $name)
}

function Find-Group($ctx, [string]$name) {
    [System.DirectoryServices.AccountManagement.GroupPrincipal]::FindByIdentity(
        $ctx, [System.DirectoryServices.AccountManagement.IdentityType]::SamAccountName, $name)
}
"#;

/// One provider operation implemented in PowerShell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Probe,
    ListRows,
    ListEntryNames,
    FindEntry,
    CommitEntry,
    CreateEntry,
    DeleteEntry,
    RenameEntry,
    SetPassword,
    AddMember,
    RemoveMember,
    FindUserPrincipal,
    FindGroupPrincipal,
    SavePrincipal,
    IsLockedOut,
    Unlock,
    IsMember,
}

impl Script {
    /// Operation name used in error context and logs.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Probe => "probe",
            Self::ListRows => "list-rows",
            Self::ListEntryNames => "list-entries",
            Self::FindEntry => "find-entry",
            Self::CommitEntry => "commit-entry",
            Self::CreateEntry => "create",
            Self::DeleteEntry => "delete",
            Self::RenameEntry => "rename",
            Self::SetPassword => "set-password",
            Self::AddMember => "add-member",
            Self::RemoveMember => "remove-member",
            Self::FindUserPrincipal => "find-principal",
            Self::FindGroupPrincipal => "find-principal",
            Self::SavePrincipal => "save-principal",
            Self::IsLockedOut => "lockout-state",
            Self::Unlock => "unlock",
            Self::IsMember => "membership",
        }
    }

    fn body(&self) -> &'static str {
        match self {
            Self::Probe => r#"
$PSVersionTable.PSVersion.Major | ConvertTo-Json -Compress
"#,
            Self::ListRows => r#"
$query = @{ ClassName = $in.WmiClass; Filter = 'LocalAccount=True' }
if ($in.Machine) { $query.ComputerName = $in.Machine }
$rows = @(Get-CimInstance @query | ForEach-Object {
    [PSCustomObject]@{ Name = [string]$_.Name; SID = [string]$_.SID }
})
ConvertTo-Json -InputObject $rows -Compress
"#,
            Self::ListEntryNames => r#"
$root = New-Object System.DirectoryServices.DirectoryEntry("WinNT://$machine,computer")
try {
    $names = @($root.Children | Where-Object { $_.SchemaClassName -eq $in.SchemaClass } |
        ForEach-Object { [string]$_.Name })
    ConvertTo-Json -InputObject $names -Compress
} finally {
    $root.Dispose()
}
"#,
            Self::FindEntry => r#"
$entry = Open-Entry $in.Name $in.SchemaClass
if (-not $entry) { exit 3 }
try {
    [PSCustomObject]@{
        Name            = [string]$entry.Name
        FullName        = Get-Prop $entry 'FullName'
        Description     = Get-Prop $entry 'Description'
        PasswordExpired = ((Get-Prop $entry 'PasswordExpired') -eq '1')
        Profile         = Get-Prop $entry 'Profile'
        LoginScript     = Get-Prop $entry 'LoginScript'
        HomeDirectory   = Get-Prop $entry 'HomeDirectory'
        HomeDirDrive    = Get-Prop $entry 'HomeDirDrive'
    } | ConvertTo-Json -Compress
} finally {
    $entry.Dispose()
}
"#,
            Self::CommitEntry => r#"
$entry = Open-Entry $in.Name $in.SchemaClass
if (-not $entry) { exit 3 }
try {
    foreach ($change in $in.Changes.PSObject.Properties) {
        if ($change.Name -eq 'PasswordExpired') {
            $entry.Properties['PasswordExpired'].Value = [int][bool]$change.Value
        } else {
            $entry.Properties[$change.Name].Value = [string]$change.Value
        }
    }
    $entry.CommitChanges()
} finally {
    $entry.Dispose()
}
"#,
            Self::CreateEntry => r#"
$root = New-Object System.DirectoryServices.DirectoryEntry("WinNT://$machine,computer")
try {
    $entry = $root.Children.Add($in.Name, $in.SchemaClass)
    try { $entry.CommitChanges() } finally { $entry.Dispose() }
} finally {
    $root.Dispose()
}
"#,
            Self::DeleteEntry => r#"
$entry = Open-Entry $in.Name $in.SchemaClass
if (-not $entry) { exit 3 }
$root = New-Object System.DirectoryServices.DirectoryEntry("WinNT://$machine,computer")
try {
    $root.Children.Remove($entry)
} finally {
    $entry.Dispose()
    $root.Dispose()
}
"#,
            Self::RenameEntry => r#"
$entry = Open-Entry $in.Name $in.SchemaClass
if (-not $entry) { exit 3 }
try {
    $entry.Rename($in.NewName)
    $entry.CommitChanges()
} finally {
    $entry.Dispose()
}
"#,
            Self::SetPassword => r#"
$entry = Open-Entry $in.Name 'User'
if (-not $entry) { exit 3 }
try {
    [void]$entry.Invoke('SetPassword', @($in.Password))
    $entry.CommitChanges()
} finally {
    $entry.Dispose()
}
"#,
            Self::AddMember => r#"
$group = Open-Entry $in.Group 'Group'
if (-not $group) { exit 3 }
$user = Open-Entry $in.Name 'User'
try {
    if (-not $user) { exit 3 }
    [void]$group.Invoke('Add', @($user.Path))
} finally {
    if ($user) { $user.Dispose() }
    $group.Dispose()
}
"#,
            Self::RemoveMember => r#"
$group = Open-Entry $in.Group 'Group'
if (-not $group) { exit 3 }
$user = Open-Entry $in.Name 'User'
try {
    if (-not $user) { exit 3 }
    [void]$group.Invoke('Remove', @($user.Path))
} finally {
    if ($user) { $user.Dispose() }
    $group.Dispose()
}
"#,
            Self::FindUserPrincipal => r#"
$ctx = New-Context
try {
    $user = Find-User $ctx $in.Name
    if (-not $user) { exit 3 }
    try {
        $last = $null
        if ($user.LastLogon) { $last = $user.LastLogon.ToUniversalTime().ToString('o') }
        [PSCustomObject]@{
            Sid                      = $user.Sid.Value
            UserCannotChangePassword = $user.UserCannotChangePassword
            PasswordNeverExpires     = $user.PasswordNeverExpires
            Enabled                  = $user.Enabled
            LockedOut                = $user.IsAccountLockedOut()
            Groups                   = @($user.GetGroups() | ForEach-Object { [string]$_.Name })
            LastLogon                = $last
        } | ConvertTo-Json -Compress -Depth 3
    } finally {
        $user.Dispose()
    }
} finally {
    $ctx.Dispose()
}
"#,
            Self::FindGroupPrincipal => r#"
$ctx = New-Context
try {
    $group = Find-Group $ctx $in.Name
    if (-not $group) { exit 3 }
    try {
        [PSCustomObject]@{
            Sid     = $group.Sid.Value
            Members = @($group.GetMembers() | ForEach-Object { [string]$_.SamAccountName })
        } | ConvertTo-Json -Compress -Depth 3
    } finally {
        $group.Dispose()
    }
} finally {
    $ctx.Dispose()
}
"#,
            Self::SavePrincipal => r#"
$ctx = New-Context
try {
    $user = Find-User $ctx $in.Name
    if (-not $user) { exit 3 }
    try {
        foreach ($change in $in.Changes.PSObject.Properties) {
            $user.($change.Name) = [bool]$change.Value
        }
        $user.Save()
    } finally {
        $user.Dispose()
    }
} finally {
    $ctx.Dispose()
}
"#,
            Self::IsLockedOut => r#"
$ctx = New-Context
try {
    $user = Find-User $ctx $in.Name
    if (-not $user) { exit 3 }
    try { $user.IsAccountLockedOut() | ConvertTo-Json -Compress } finally { $user.Dispose() }
} finally {
    $ctx.Dispose()
}
"#,
            Self::Unlock => r#"
$ctx = New-Context
try {
    $user = Find-User $ctx $in.Name
    if (-not $user) { exit 3 }
    try {
        $user.UnlockAccount()
        $user.Save()
    } finally {
        $user.Dispose()
    }
} finally {
    $ctx.Dispose()
}
"#,
            Self::IsMember => r#"
$ctx = New-Context
try {
    $user = Find-User $ctx $in.Name
    $group = Find-Group $ctx $in.Group
    try {
        $member = [bool]($user -and $group -and $user.IsMemberOf($group))
        $member | ConvertTo-Json -Compress
    } finally {
        if ($user) { $user.Dispose() }
        if ($group) { $group.Dispose() }
    }
} finally {
    $ctx.Dispose()
}
"#,
        }
    }

    /// Full script text: shared prelude followed by the operation body.
    pub fn source(&self) -> String {
        format!("{}\n{}", PRELUDE, self.body())
    }

    /// Script encoded for `-EncodedCommand` (base64 of UTF-16LE).
    pub fn encoded(&self) -> String {
        encode_command(&self.source())
    }
}

/// Encodes a script the way `powershell.exe -EncodedCommand` expects.
pub fn encode_command(script: &str) -> String {
    let bytes: Vec<u8> = script.encode_utf16().flat_map(u16::to_le_bytes).collect();
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_command() {
        // "dir" as UTF-16LE
        assert_eq!(encode_command("dir"), "ZABpAHIA");
    }

    #[test]
    fn test_scripts_read_input_from_stdin() {
        for script in [Script::FindEntry, Script::SetPassword, Script::SavePrincipal] {
            let source = script.source();
            assert!(source.contains("[Console]::In.ReadToEnd()"));
            assert!(source.contains("$ErrorActionPreference = 'Stop'"));
        }
    }

    #[test]
    fn test_secrets_never_inlined() {
        let source = Script::SetPassword.source();
        assert!(source.contains("$in.Password"));
        assert!(!source.contains("ConvertTo-SecureString"));
    }

    #[test]
    fn test_not_found_exit_code() {
        for script in [Script::FindEntry, Script::FindUserPrincipal, Script::Unlock] {
            assert!(script.source().contains(&format!("exit {}", EXIT_NOT_FOUND)));
        }
    }

    #[test]
    fn test_last_logon_uses_unboxed_datetime() {
        // Nullable<DateTime> arrives unboxed, so `.Value` would be $null
        let source = Script::FindUserPrincipal.source();
        assert!(source.contains("$user.LastLogon.ToUniversalTime().ToString('o')"));
        assert!(!source.contains("LastLogon.Value"));
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Script::CommitEntry.operation(), "commit-entry");
        assert_eq!(Script::SavePrincipal.operation(), "save-principal");
    }
}
