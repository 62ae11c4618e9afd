mod action_tests;
