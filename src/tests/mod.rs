//! Scenario suites driving the agent loop end to end with a scripted model.
