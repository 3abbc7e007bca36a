mod store_policy_tests;
