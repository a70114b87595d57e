mod reconciler_test;
