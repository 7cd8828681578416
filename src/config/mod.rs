pub mod mongo_config;
