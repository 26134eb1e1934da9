mod capture;
mod decision;
mod energy;
mod lifecycle;
mod movement;
