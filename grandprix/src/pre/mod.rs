pub mod read_sim_pars;
pub mod sim_constants;
pub mod sim_opts;
