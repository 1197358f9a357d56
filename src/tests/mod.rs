mod api_integration_test;
