mod addressing;
mod congestion;
mod network_integration;
mod packet;
mod queues;
mod routing_table;
mod simulator;
mod support;
