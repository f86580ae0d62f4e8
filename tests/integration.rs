// Integration tests module

mod integration {
    mod cleanup_test;
    mod config_test;
    mod monitor_test;
    mod optimizer_test;
    mod turbo_test;
}
