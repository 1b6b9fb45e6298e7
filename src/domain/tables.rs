// Reference spellings used by the normalisation and folding rules.
// Lookups are case-insensitive and return the canonical spelling.

/// Keywords, cmdlets, type names and members with their canonical casing.
const BAREWORDS: &[&str] = &[
    // Cmdlets
    "Add-Content", "Add-Member", "Add-Type", "Clear-Host", "Compare-Object",
    "ConvertFrom-Json", "ConvertTo-Json", "ConvertTo-SecureString", "Copy-Item",
    "Export-Csv", "ForEach-Object", "Format-List", "Format-Table", "Get-ChildItem",
    "Get-Command", "Get-Content", "Get-Date", "Get-Item", "Get-ItemProperty",
    "Get-Location", "Get-Member", "Get-Process", "Get-Random", "Get-Service",
    "Get-Variable", "Get-WmiObject", "Get-CimInstance", "Import-Module",
    "Invoke-Command", "Invoke-Expression", "Invoke-Item", "Invoke-RestMethod",
    "Invoke-WebRequest", "Measure-Object", "Move-Item", "New-Item", "New-Object",
    "New-Variable", "Out-File", "Out-Null", "Out-String", "Read-Host",
    "Remove-Item", "Remove-Variable", "Rename-Item", "Select-Object",
    "Select-String", "Set-Content", "Set-ExecutionPolicy", "Set-Item",
    "Set-ItemProperty", "Set-Location", "Set-Variable", "Sort-Object",
    "Split-Path", "Start-Job", "Start-Process", "Start-Sleep", "Stop-Process",
    "Test-Connection", "Test-Path", "Where-Object", "Write-Error", "Write-Host",
    "Write-Output", "Write-Verbose", "Write-Warning", "Join-Path",
    // Verbs and nouns reached through `-` splitting
    "Add", "Clear", "Compare", "ConvertFrom", "ConvertTo", "Copy", "Export",
    "ForEach", "Format", "Get", "Import", "Invoke", "Join", "Measure", "Move",
    "New", "Out", "Read", "Remove", "Rename", "Select", "Set", "Sort", "Split",
    "Start", "Stop", "Test", "Where", "Write", "ChildItem", "Command", "Content",
    "Date", "Expression", "Host", "Item", "ItemProperty", "Location", "Member",
    "Module", "Null", "Object", "Output", "Path", "Process", "Random",
    "RestMethod", "Service", "Sleep", "String", "Variable", "WebRequest",
    // Types and namespaces
    "System", "Text", "Encoding", "ASCII", "UTF8", "Unicode", "Convert",
    "IO", "File", "Directory", "MemoryStream", "StreamReader", "Compression",
    "GZipStream", "DeflateStream", "CompressionMode", "Net", "WebClient",
    "Management", "Automation", "PSObject", "Runtime", "InteropServices",
    "Marshal", "Reflection", "Assembly", "Security", "Cryptography",
    "Environment", "Math", "Char", "Byte", "Int32", "Int64", "Array",
    "Diagnostics", "ProcessStartInfo", "Type", "ScriptBlock",
    // Members
    "FromBase64String", "ToBase64String", "GetString", "GetBytes", "Invoke",
    "Replace", "Split", "Substring", "ToCharArray", "ToLower", "ToUpper",
    "ToString", "Trim", "TrimStart", "TrimEnd", "Reverse", "Length", "Count",
    "DownloadString", "DownloadFile", "DownloadData", "ReadToEnd", "Create",
    "InvokeScript", "ExecutionContext", "InvokeCommand", "NewScriptBlock",
    "GetMethod", "GetField", "GetValue", "SetValue", "Decompress", "Load",
    "Insert", "IndexOf", "Contains", "StartsWith", "EndsWith",
    // Keywords and common parameter names
    "Bypass", "Hidden", "NoProfile", "NonInteractive", "Force", "ExecutionPolicy",
    "WindowStyle", "EncodedCommand", "TypeName", "ArgumentList", "FilePath",
    "ComObject", "Name", "Value", "Scope",
];

/// Alias to cmdlet expansion.
const ALIASES: &[(&str, &str)] = &[
    ("%", "ForEach-Object"),
    ("?", "Where-Object"),
    ("ac", "Add-Content"),
    ("cat", "Get-Content"),
    ("cd", "Set-Location"),
    ("chdir", "Set-Location"),
    ("clc", "Clear-Content"),
    ("cls", "Clear-Host"),
    ("copy", "Copy-Item"),
    ("cp", "Copy-Item"),
    ("del", "Remove-Item"),
    ("dir", "Get-ChildItem"),
    ("echo", "Write-Output"),
    ("erase", "Remove-Item"),
    ("foreach", "ForEach-Object"),
    ("gc", "Get-Content"),
    ("gci", "Get-ChildItem"),
    ("gcm", "Get-Command"),
    ("gi", "Get-Item"),
    ("gl", "Get-Location"),
    ("gm", "Get-Member"),
    ("gp", "Get-ItemProperty"),
    ("gps", "Get-Process"),
    ("gsv", "Get-Service"),
    ("gv", "Get-Variable"),
    ("gwmi", "Get-WmiObject"),
    ("icm", "Invoke-Command"),
    ("iex", "Invoke-Expression"),
    ("ii", "Invoke-Item"),
    ("ipmo", "Import-Module"),
    ("irm", "Invoke-RestMethod"),
    ("iwr", "Invoke-WebRequest"),
    ("kill", "Stop-Process"),
    ("ls", "Get-ChildItem"),
    ("measure", "Measure-Object"),
    ("mi", "Move-Item"),
    ("move", "Move-Item"),
    ("mv", "Move-Item"),
    ("ni", "New-Item"),
    ("nv", "New-Variable"),
    ("ps", "Get-Process"),
    ("pwd", "Get-Location"),
    ("rd", "Remove-Item"),
    ("ri", "Remove-Item"),
    ("rm", "Remove-Item"),
    ("rmdir", "Remove-Item"),
    ("rv", "Remove-Variable"),
    ("sal", "Set-Alias"),
    ("saps", "Start-Process"),
    ("sc", "Set-Content"),
    ("select", "Select-Object"),
    ("set", "Set-Variable"),
    ("si", "Set-Item"),
    ("sl", "Set-Location"),
    ("sleep", "Start-Sleep"),
    ("sort", "Sort-Object"),
    ("sp", "Set-ItemProperty"),
    ("spps", "Stop-Process"),
    ("start", "Start-Process"),
    ("sv", "Set-Variable"),
    ("type", "Get-Content"),
    ("where", "Where-Object"),
    ("write", "Write-Output"),
];

/// Automatic and preference variables: canonical name and, where it is
/// stable across hosts, its default string value.
const SPECIAL_VARS: &[(&str, Option<&str>)] = &[
    ("$", None),
    ("?", None),
    ("^", None),
    ("_", None),
    ("args", None),
    ("ConfirmPreference", Some("High")),
    ("ConsoleFileName", None),
    ("DebugPreference", Some("SilentlyContinue")),
    ("Error", None),
    ("ErrorActionPreference", Some("Continue")),
    ("ErrorView", Some("NormalView")),
    ("ExecutionContext", None),
    ("false", None),
    ("foreach", None),
    ("FormatEnumerationLimit", Some("4")),
    ("HOME", None),
    ("Host", None),
    ("input", None),
    ("LASTEXITCODE", None),
    ("MaximumAliasCount", Some("4096")),
    ("MaximumDriveCount", Some("4096")),
    ("MaximumErrorCount", Some("256")),
    ("MaximumFunctionCount", Some("4096")),
    ("MaximumHistoryCount", Some("4096")),
    ("MaximumVariableCount", Some("4096")),
    ("Matches", None),
    ("MyInvocation", None),
    ("NestedPromptLevel", None),
    ("null", None),
    ("OutputEncoding", None),
    ("PID", None),
    ("PROFILE", None),
    ("ProgressPreference", Some("Continue")),
    ("PSBoundParameters", None),
    ("PSCommandPath", None),
    ("PSCulture", None),
    ("PSDefaultParameterValues", None),
    ("PSEmailServer", None),
    ("PSItem", None),
    ("PSHOME", Some("C:\\Windows\\System32\\WindowsPowerShell\\v1.0")),
    ("PSScriptRoot", None),
    ("PSSessionApplicationName", Some("wsman")),
    ("PSSessionConfigurationName", Some("http://schemas.microsoft.com/powershell/Microsoft.PowerShell")),
    ("PSUICulture", None),
    ("PSVersionTable", None),
    ("PWD", None),
    ("ShellId", Some("Microsoft.PowerShell")),
    ("StackTrace", None),
    ("switch", None),
    ("this", None),
    ("true", None),
    ("VerbosePreference", Some("SilentlyContinue")),
    ("WarningPreference", Some("Continue")),
    ("WhatIfPreference", Some("False")),
    ("env:ComSpec", Some("C:\\Windows\\system32\\cmd.exe")),
    ("env:PUBLIC", Some("C:\\Users\\Public")),
    ("env:SystemRoot", Some("C:\\Windows")),
    ("env:windir", Some("C:\\Windows")),
    ("env:ProgramData", Some("C:\\ProgramData")),
];

/// Canonical casing of a known bareword.
pub fn bareword(word: &str) -> Option<&'static str> {
    BAREWORDS
        .iter()
        .copied()
        .find(|w| w.eq_ignore_ascii_case(word))
}

/// Full cmdlet name of a command alias.
pub fn alias_target(alias: &str) -> Option<&'static str> {
    ALIASES
        .iter()
        .find(|(a, _)| a.eq_ignore_ascii_case(alias))
        .map(|(_, target)| *target)
}

/// Canonical name of an automatic variable.
pub fn special_var(name: &str) -> Option<&'static str> {
    SPECIAL_VARS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(n, _)| *n)
}

/// Known default value of an automatic variable.
pub fn special_var_value(name: &str) -> Option<&'static str> {
    SPECIAL_VARS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .and_then(|(_, v)| *v)
}

/// Whether the variable path carries a drive or scope prefix (`env:`,
/// `global:`, `variable:`...). Such names are never treated as plain
/// script-local variables.
pub fn is_prefixed(path: &str) -> bool {
    path.contains(':')
}

/// Recases every `.`/`-` separated segment of `word` found in the bareword
/// table. A surrounding `[...]` is kept.
pub fn canonical_case(word: &str) -> String {
    let (open, inner, close) = match word.strip_prefix('[').and_then(|w| w.strip_suffix(']')) {
        Some(inner) => ("[", inner, "]"),
        None => ("", word, ""),
    };
    let recase = |sep: char, text: &str| -> String {
        text.split(sep)
            .map(|seg| bareword(seg).unwrap_or(seg))
            .collect::<Vec<_>>()
            .join(&sep.to_string())
    };
    let dotted = recase('.', inner);
    format!("{}{}{}", open, recase('-', &dotted), close)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookups() {
        assert_eq!(bareword("invoke-expression"), Some("Invoke-Expression"));
        assert_eq!(alias_target("IEX"), Some("Invoke-Expression"));
        assert_eq!(special_var("shellid"), Some("ShellId"));
        assert_eq!(special_var_value("PsHome"), Some("C:\\Windows\\System32\\WindowsPowerShell\\v1.0"));
        assert_eq!(special_var_value("args"), None);
    }

    #[test]
    fn test_prefixed() {
        assert!(is_prefixed("ENV:ComSpec"));
        assert!(is_prefixed("script:counter"));
        assert!(!is_prefixed("x"));
    }

    #[test]
    fn test_canonical_case() {
        assert_eq!(canonical_case("system.text.encoding"), "System.Text.Encoding");
        assert_eq!(canonical_case("[system.convert]"), "[System.Convert]");
        assert_eq!(canonical_case("new-OBJECT"), "New-Object");
        assert_eq!(canonical_case("unknownWord"), "unknownWord");
    }
}
