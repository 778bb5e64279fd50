use parley_server::engine::command::{HISTORY_TOKEN, USER_COUNT_TOKEN};

/// Build the line sent to the server for one line of user input.
/// Control tokens go out bare; everything else is prefixed with the display name.
pub fn outgoing_line(name: &str, input: &str) -> String {
    let input = input.trim_end_matches(['\r', '\n']);
    match input.trim() {
        HISTORY_TOKEN => HISTORY_TOKEN.to_string(),
        USER_COUNT_TOKEN => USER_COUNT_TOKEN.to_string(),
        _ => format!("{}: {}", name, input),
    }
}
