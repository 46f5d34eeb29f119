//! The multicast state of one network interface.
use rand::RngCore;

use crate::layer::{igmp, mcast, Result};
use crate::nic::Device;
use crate::time::{Expiration, Instant};
use crate::wire::{Ipv4Address, Ipv4Cidr, Ipv4Repr};

/// Owner of the filter table and the IGMP host of an interface.
///
/// Holds up to `G` groups with up to `S` sources each. Every method that may send takes the
/// device and the current time, nothing happens in between calls.
///
/// ```
/// use igmp_host::layer::interface::Interface;
/// use igmp_host::layer::igmp::Config;
/// use igmp_host::layer::mcast::SocketFilter;
/// use igmp_host::nic::loopback::Loopback;
/// use igmp_host::time::Instant;
/// use igmp_host::wire::{Ipv4Address, Ipv4Cidr};
/// use rand::{SeedableRng, rngs::SmallRng};
///
/// let mut nic = Loopback::<4, 4>::new();
/// let mut iface = Interface::<_, 4, 4>::new(Config::default(), SmallRng::seed_from_u64(0));
/// iface.set_address(Some(Ipv4Cidr::new(Ipv4Address::new(10, 0, 0, 1), 24)));
///
/// let group = Ipv4Address::new(239, 1, 1, 1);
/// let sockets: [SocketFilter<4>; 0] = [];
/// iface.join(&mut nic, &sockets, Instant::from_millis(0), group).unwrap();
/// iface.tick(&mut nic, Instant::from_millis(0));
///
/// // The join was announced to all IGMPv3 routers.
/// let report = nic.take().unwrap();
/// assert_eq!(report.meta().dst_addr, Ipv4Address::MULTICAST_ALL_IGMPV3_ROUTERS);
/// assert!(iface.accepts(group, Ipv4Address::new(10, 0, 0, 9)));
/// ```
pub struct Interface<R, const G: usize, const S: usize> {
    address: Option<Ipv4Cidr>,
    filters: mcast::FilterTable<G, S>,
    host: igmp::Host<G, S>,
    rng: R,
}

/// Delivers reception state changes of the filter table to the host.
struct Announce<'a, R: ?Sized, const G: usize, const S: usize> {
    host: &'a mut igmp::Host<G, S>,
    rng: &'a mut R,
    src_addr: Option<Ipv4Address>,
    now: Instant,
}

impl<R: RngCore, const G: usize, const S: usize> Interface<R, G, S> {
    /// Bring up the multicast state of an interface, without any address.
    pub fn new(config: igmp::Config, rng: R) -> Self {
        Interface {
            address: None,
            filters: mcast::FilterTable::new(),
            host: igmp::Host::new(config),
            rng,
        }
    }

    /// Configure the unicast address of the interface.
    ///
    /// Groups are only announced once there is an address.
    pub fn set_address(&mut self, address: Option<Ipv4Cidr>) {
        self.address = address;
    }

    /// The unicast address of the interface.
    pub fn address(&self) -> Option<Ipv4Cidr> {
        self.address
    }

    /// The IGMP host state.
    pub fn host(&self) -> &igmp::Host<G, S> {
        &self.host
    }

    /// The multicast reception state.
    pub fn filters(&self) -> &mcast::FilterTable<G, S> {
        &self.filters
    }

    /// Check if a datagram from `src` to `group` should be received.
    pub fn accepts(&self, group: Ipv4Address, src: Ipv4Address) -> bool {
        self.filters.accepts(group, src)
    }

    /// The next instant at which `tick` should be called.
    pub fn poll_at(&self, now: Instant) -> Expiration {
        self.host.poll_at(now, self.address.is_some())
    }

    /// Evaluate all protocol timers.
    pub fn tick<D>(&mut self, nic: &mut D, now: Instant)
        where D: Device + ?Sized,
    {
        let mut tx = igmp::Sender::new(nic, self.src_addr());
        self.host.tick(&mut tx, &mut self.rng, now);
    }

    /// Restart the protocol after the link was down.
    pub fn link_change(&mut self) {
        self.host.link_change()
    }

    /// Process an IGMP message received on the interface.
    pub fn process_message(&mut self, now: Instant, ip: &Ipv4Repr, message: &[u8]) {
        self.host.recv(&mut self.rng).receive(now, ip, message)
    }

    /// Process an IGMP message and pass it on to an upper handler.
    pub fn process_message_with<H>(&mut self, now: Instant, ip: &Ipv4Repr, message: &[u8], handler: H)
        where H: igmp::Recv,
    {
        self.host.recv_with(&mut self.rng, handler).receive(now, ip, message)
    }

    /// Join a group for all sources.
    ///
    /// The current socket memberships are folded into the new reception state.
    pub fn join<D, M>(&mut self, nic: &mut D, sockets: &M, now: Instant, group: Ipv4Address)
        -> Result<()>
    where
        D: Device + ?Sized,
        M: mcast::Memberships<S> + ?Sized,
    {
        let (filters, mut announce) = self.split(now);
        filters.join(nic, sockets, group, &mut announce)
    }

    /// Undo one any-source join of a group.
    pub fn leave<D, M>(&mut self, nic: &mut D, sockets: &M, now: Instant, group: Ipv4Address)
        -> Result<()>
    where
        D: Device + ?Sized,
        M: mcast::Memberships<S> + ?Sized,
    {
        let (filters, mut announce) = self.split(now);
        filters.leave(nic, sockets, group, &mut announce)
    }

    /// Recompute the reception state after socket memberships changed.
    ///
    /// Pass the affected group, or `None` to recompute all groups.
    pub fn update_multicast_filter<D, M>(&mut self, nic: &mut D, sockets: &M, now: Instant, group: Option<Ipv4Address>)
    where
        D: Device + ?Sized,
        M: mcast::Memberships<S> + ?Sized,
    {
        let (filters, mut announce) = self.split(now);
        filters.recompute(nic, sockets, group, &mut announce)
    }

    fn src_addr(&self) -> Option<Ipv4Address> {
        self.address.map(|cidr| cidr.address())
    }

    fn split(&mut self, now: Instant) -> (&mut mcast::FilterTable<G, S>, Announce<'_, R, G, S>) {
        let announce = Announce {
            src_addr: self.src_addr(),
            host: &mut self.host,
            rng: &mut self.rng,
            now,
        };
        (&mut self.filters, announce)
    }
}

impl<D, R, const G: usize, const S: usize> mcast::StateChange<D, S> for Announce<'_, R, G, S>
where
    D: Device + ?Sized,
    R: RngCore + ?Sized,
{
    fn state_change(&mut self, nic: &mut D, group: Ipv4Address, filter: &mcast::Filter<S>) {
        let mut tx = igmp::Sender::new(nic, self.src_addr);
        self.host.state_change(&mut tx, &mut *self.rng, self.now, group, filter);
    }
}
