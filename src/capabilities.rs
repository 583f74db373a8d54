use crate::jvmti_wrapper::Jvmti;

/// Requests every capability the host is able to grant.
///
/// Failures are logged and otherwise ignored; the agent runs with whatever it
/// ends up holding. Returns whether the full potential set was granted.
pub fn negotiate_all(jvmti: &Jvmti) -> bool {
    let Some(caps) = jvmti.check(jvmti.get_potential_capabilities(), "Failed to get potential capabilities") else {
        return false;
    };
    jvmti
        .check(jvmti.add_capabilities(&caps), "Failed to add capabilities")
        .is_some()
}
