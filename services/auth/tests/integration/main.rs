
mod authcode_test;
mod profile_test;
mod router_test;
mod session_test;
