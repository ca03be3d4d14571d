//! Topic naming: `{hostname}/user/{username}/status`.

/// Topic on which a user's activity state is published.
///
/// ```
/// use idle_tracker::sink::topic::status_topic;
///
/// assert_eq!(status_topic("box1", "alice"), "box1/user/alice/status");
/// ```
pub fn status_topic(host: &str, user: &str) -> String {
    format!("{host}/user/{user}/status")
}

/// Host name of this machine, if the OS reports one.
pub fn local_host_name() -> Option<String> {
    sysinfo::System::host_name().filter(|h| !h.is_empty())
}

/// Login name of the current user, from `USER` then `LOGNAME`.
pub fn local_user_name() -> Option<String> {
    ["USER", "LOGNAME"]
        .iter()
        .filter_map(|k| std::env::var(k).ok())
        .find(|v| !v.is_empty())
}
