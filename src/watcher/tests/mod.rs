// Scenario tests for the client poller





#[cfg(test)]
pub mod test_helpers;
