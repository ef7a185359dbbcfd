pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_VLAN: u16 = 0x8100;

pub const IP_PROTO_TCP: u8 = 6;
pub const IP_PROTO_UDP: u8 = 17;

pub const TCP_FLAG_FIN: u8 = 0x01;
pub const TCP_FLAG_SYN: u8 = 0x02;
pub const TCP_FLAG_RST: u8 = 0x04;
pub const TCP_FLAG_PSH: u8 = 0x08;
pub const TCP_FLAG_ACK: u8 = 0x10;
pub const TCP_FLAG_URG: u8 = 0x20;
pub const TCP_FLAG_ECE: u8 = 0x40;
pub const TCP_FLAG_CWR: u8 = 0x80;

// Fixed header sizes assumed by payload and overhead accounting.
pub const ASSUMED_LINK_HEADER: u64 = 14;
pub const ASSUMED_IP_HEADER: u64 = 20;
pub const ASSUMED_TCP_HEADER: u64 = 20;
pub const ASSUMED_UDP_HEADER: u64 = 8;
