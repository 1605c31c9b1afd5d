mod agent_loop;
mod configuration;
mod one_shot;
